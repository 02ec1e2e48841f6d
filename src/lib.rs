// Library root
// -----------
// This crate exposes the library surface behind the `gdvc` binary. The
// binary (`main.rs`) parses arguments and hands off to `commands`.
//
// Module responsibilities:
// - `config`: The project manifest (`.gdvc_config.json`): versions, the
//   active/public version and tracked directories.
// - `folder_url`: Turning Drive folder URLs into folder IDs and back.
// - `auth`: Resolving Google credentials into something the API accepts.
// - `api`: The blocking Drive v3 client and the `Remote` trait commands
//   are written against.
// - `scan`: Walking local trees, counting files, flagging sensitive ones.
// - `ui`: Prompts and progress bars.
// - `commands`: One module per subcommand.
pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod folder_url;
pub mod scan;
pub mod ui;
