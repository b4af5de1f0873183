pub(crate) mod callback_controller;
pub(crate) mod logout_controller;
