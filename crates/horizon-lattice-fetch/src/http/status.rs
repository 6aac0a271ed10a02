//! Status code classification.

use std::fmt;

/// Status family, from the hundreds digit of the code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFamily {
    /// 1xx
    Info,
    /// 2xx
    Ok,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything else.
    Unknown,
}

impl StatusFamily {
    /// Classify a status code.
    pub fn from_code(code: u16) -> Self {
        match code / 100 {
            1 => Self::Info,
            2 => Self::Ok,
            3 => Self::Redirection,
            4 => Self::ClientError,
            5 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether this family is a client or server error.
    pub fn is_error(self) -> bool {
        matches!(self, Self::ClientError | Self::ServerError)
    }
}

impl fmt::Display for StatusFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Ok => "ok",
            Self::Redirection => "redirection",
            Self::ClientError => "client error",
            Self::ServerError => "server error",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

macro_rules! statuses {
    ($($variant:ident = $code:literal),+ $(,)?) => {
        /// Named well-known status codes.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Status {
            $(
                #[doc = concat!("`", stringify!($code), "`")]
                $variant,
            )+
            /// A code without a name here.
            Unknown,
        }

        impl Status {
            /// Name a status code, or [`Status::Unknown`].
            pub fn from_code(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }

            /// The numeric code, or `None` for [`Status::Unknown`].
            pub fn code(self) -> Option<u16> {
                match self {
                    $(Self::$variant => Some($code),)+
                    Self::Unknown => None,
                }
            }
        }
    };
}

statuses! {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthoritativeInfo = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,
    MultiStatus = 207,
    MultipleChoices = 300,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    TemporaryRedirect = 307,
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthentication = 407,
    RequestTimeout = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    RequestEntityTooLarge = 413,
    RequestUriTooLong = 414,
    UnsupportedMediaType = 415,
    RequestedRangeNotSatisfiable = 416,
    ExpectationFailed = 417,
    AuthenticationTimeout = 419,
    TooManyRequests = 429,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{code} {self:?}"),
            None => f.write_str("Unknown"),
        }
    }
}
