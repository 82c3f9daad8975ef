//! Builders for requests and store hazard queries.
