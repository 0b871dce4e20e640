// Domain-layer modules and shared errors/models
pub mod contact {
    pub use crate::contact::*;
}

pub mod places {
    pub use crate::places::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
