mod deploy;
mod doctor;
mod eject;
mod init;
mod package;
mod pipeline;
mod plan;

pub use deploy::deploy;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init_project;
pub use package::package;
pub use plan::plan;
