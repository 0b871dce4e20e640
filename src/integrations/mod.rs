//! External service integrations.

pub mod mail {
    pub use crate::mail::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod geoapify_models {
    pub use crate::geoapify_models::*;
}

pub mod nominatim_models {
    pub use crate::nominatim_models::*;
}
