#[cfg(feature = "python")]
pub(crate) mod state;
