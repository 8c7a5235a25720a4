use core::fmt;
use core::str::FromStr;

use crate::error::RestQueryError;

/// The HTTP verbs a [`RequestBuilder`](crate::RequestBuilder) accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RestQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RestQueryError::validation(format!("Invalid HTTP method '{s}'")))
    }
}

impl TryFrom<&str> for Method {
    type Error = RestQueryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_verbs_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Put".parse::<Method>().unwrap(), Method::Put);
        assert_eq!(" delete ".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn rejects_other_verbs() {
        for verb in ["PATCH", "HEAD", "", "GETT"] {
            let err = verb.parse::<Method>().unwrap_err();
            assert!(matches!(err, RestQueryError::Validation(_)), "{verb}: {err:?}");
        }
    }

    #[test]
    fn converts_to_http_method() {
        for method in Method::ALL {
            assert_eq!(http::Method::from(method).as_str(), method.as_str());
        }
    }
}
