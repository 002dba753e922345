/// Camera access as seen by the scanner screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// Denied, the app may still ask again
    SoftDenied,
    /// Denied and the platform suppresses further prompts, the user has to
    /// grant access from system settings
    HardDenied,
}

impl PermissionState {
    /// `can_reprompt` is whether the platform still allows an in-app request.
    pub fn from_request(granted: bool, can_reprompt: bool) -> Self {
        match (granted, can_reprompt) {
            (true, _) => Self::Granted,
            (false, true) => Self::SoftDenied,
            (false, false) => Self::HardDenied,
        }
    }

    pub fn can_scan(self) -> bool {
        self == Self::Granted
    }

    pub fn needs_settings(self) -> bool {
        self == Self::HardDenied
    }
}
