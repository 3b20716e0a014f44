mod export;
mod food;
mod helpers;
mod import;
mod inspect;
mod log;
mod profile;
mod settings;

pub(crate) use export::cmd_export;
pub(crate) use food::cmd_food_list;
pub(crate) use import::cmd_import;
pub(crate) use inspect::cmd_inspect;
pub(crate) use log::{cmd_log_list, cmd_log_note, cmd_log_show};
pub(crate) use profile::{cmd_profile_add, cmd_profile_list};
pub(crate) use settings::{cmd_settings_set, cmd_settings_show};
