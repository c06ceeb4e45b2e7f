use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub struct Permissions<Ev> {
    context: CapabilityContext<PermissionOperation, Ev>,
}

impl<Ev> Capability<Ev> for Permissions<Ev> {
    type Operation = PermissionOperation;
    type MappedSelf<MappedEv> = Permissions<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Permissions::new(self.context.map_event(f))
    }
}

impl<Ev> Permissions<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PermissionOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn check<F>(&self, permission: Permission, callback: F)
    where
        F: FnOnce(PermissionResult) -> Ev + Send + 'static,
    {
        self.run(PermissionOperation::Check(permission), callback);
    }

    pub fn request<F>(&self, permission: Permission, callback: F)
    where
        F: FnOnce(PermissionResult) -> Ev + Send + 'static,
    {
        self.run(PermissionOperation::Request(permission), callback);
    }

    fn run<F>(&self, operation: PermissionOperation, callback: F)
    where
        F: FnOnce(PermissionResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Writing to shared storage / the photo library.
    StorageWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionOperation {
    Check(Permission),
    Request(Permission),
}

impl Operation for PermissionOperation {
    type Output = PermissionResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Limited,
    Blocked,
    Unavailable,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }

    pub fn should_show_settings_prompt(&self) -> bool {
        matches!(self, PermissionStatus::Blocked)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PermissionError {
    #[error("permission {permission:?} is not supported on this platform")]
    Unsupported { permission: Permission },

    #[error("permission service failed: {message}")]
    Platform { message: String },
}

pub type PermissionResult = Result<PermissionStatus, PermissionError>;
