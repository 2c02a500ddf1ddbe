pub(crate) mod expiry;
