pub(crate) mod classes;
pub(crate) mod ledger;
pub(crate) mod scoring;
pub(crate) mod test_engine;
