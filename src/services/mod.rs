pub mod relay;
pub mod validation;
pub mod webhook;
