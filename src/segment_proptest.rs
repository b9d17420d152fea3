//! Property-based tests for range planning and record naming.
