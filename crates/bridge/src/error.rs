use thiserror::Error;

/// Raised while assembling the action registry. Hosts treat it as fatal and
/// abort startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Action '{namespace}:{action}' already exists.")]
    DuplicateAction { namespace: String, action: String },

    #[error("Native Actions Set '{namespace}' already exists.")]
    DuplicateNamespace { namespace: String },
}

/// A remote-originated call that names something the registry does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Native Actions Set '{namespace}' not implemented. Cannot call '{namespace}:{action}'.")]
    MissingNamespace { namespace: String, action: String },

    #[error("Native Action '{namespace}:{action}' not implemented.")]
    MissingAction { namespace: String, action: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("cannot encode payload: {0}")]
    Encode(String),

    #[error("cannot parse: {0}")]
    Decode(String),
}

/// Delivered to the error continuation of a native-originated call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebCallError {
    /// The web side answered with an error.
    #[error("{0}")]
    Remote(String),

    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("outbound channel closed before '{namespace}:{action}' could be sent")]
    ChannelClosed { namespace: String, action: String },

    #[error("call {call_id} to '{namespace}:{action}' expired after {waited_ms}ms")]
    Expired {
        call_id: u64,
        namespace: String,
        action: String,
        waited_ms: u64,
    },

    #[error("bridge dropped the call before a result arrived")]
    Dropped,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bridge config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("channel.object '{0}' is not a valid script identifier path")]
    InvalidObject(String),
}
