pub mod replay;
pub mod scripted;
pub mod stub;

pub use replay::ReplayBackend;
pub use scripted::ScriptedBackend;
pub use stub::StubBackend;
