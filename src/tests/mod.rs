mod support;

mod test_common_validation;
#[cfg(feature = "tokio")]
mod test_async;
