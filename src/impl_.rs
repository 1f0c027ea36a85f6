//! Implementation details shared by the guard types.

pub(crate) mod not_send;
