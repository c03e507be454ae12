pub(super) mod callback;
pub(super) mod login;
pub(super) mod redirect;
