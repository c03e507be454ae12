pub(crate) mod deployment;
pub(crate) mod google;
pub(crate) mod session;
pub(crate) mod token;
