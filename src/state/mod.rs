pub mod auth_form;
