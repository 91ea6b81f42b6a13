pub(crate) mod build;
pub(crate) mod dump;

pub(crate) use build::build;
pub(crate) use dump::dump;
