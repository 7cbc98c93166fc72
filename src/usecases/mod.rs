pub mod push;

#[cfg(test)]
pub(crate) mod test_support;
