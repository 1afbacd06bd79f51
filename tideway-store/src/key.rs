//! Key construction from caller-supplied format strings.

/// A caller-supplied key format with positional `%s` substitution.
///
/// Collections are addressed by substituting a parameter tuple into the
/// format, e.g. `feed:%s:%s` with `["user42", "photos"]` renders
/// `feed:user42:photos`. With no parameters the format is used verbatim,
/// which is how single-collection deployments configure their key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFormat {
    format: String,
}

impl KeyFormat {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Substitute `params` into the format, in order.
    ///
    /// Placeholders beyond the supplied parameters are left literal.
    pub fn render(&self, params: &[&str]) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut rest = self.format.as_str();
        let mut params = params.iter();

        while let Some(pos) = rest.find("%s") {
            let Some(param) = params.next() else { break };
            out.push_str(&rest[..pos]);
            out.push_str(param);
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl From<&str> for KeyFormat {
    fn from(format: &str) -> Self {
        Self::new(format)
    }
}
