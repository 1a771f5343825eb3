use std::fmt;
use std::hash::{Hash, Hasher};

/// A single owner referenced by an ownership rule: an individual user (by
/// handle or email) or a team in `org/team` form.
///
/// Equality and hashing are case-insensitive over tag + identifier. The
/// original casing is preserved for display.
#[derive(Debug, Clone)]
pub enum OwnerRef {
    User { handle: String },
    Team { slug: String },
}

impl OwnerRef {
    /// Tag an owner token from a rule line. Tokens with an `org/team` shape
    /// are teams; everything else (handles, emails) is a user. A leading `@`
    /// is not part of the identifier.
    pub fn from_token(token: &str) -> OwnerRef {
        let identifier = token.strip_prefix('@').unwrap_or(token);
        if identifier.contains('/') {
            OwnerRef::Team {
                slug: identifier.to_owned(),
            }
        } else {
            OwnerRef::User {
                handle: identifier.to_owned(),
            }
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            OwnerRef::User { handle } => handle,
            OwnerRef::Team { slug } => slug,
        }
    }

    pub fn is_team(&self) -> bool {
        matches!(self, OwnerRef::Team { .. })
    }

    /// Lowercased identifier, the form used for matching against approvals.
    pub(crate) fn normalized(&self) -> String {
        self.identifier().to_ascii_lowercase()
    }

    /// Stable key for owner-set signatures: tag prefix + lowercased
    /// identifier.
    pub(crate) fn signature_key(&self) -> String {
        match self {
            OwnerRef::User { handle } => format!("user:{}", handle.to_ascii_lowercase()),
            OwnerRef::Team { slug } => format!("team:{}", slug.to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identifier = self.identifier();
        // Emails are written as-is; handles and team slugs get the @ back.
        if identifier.contains('@') {
            write!(f, "{}", identifier)
        } else {
            write!(f, "@{}", identifier)
        }
    }
}

impl PartialEq for OwnerRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OwnerRef::User { handle: a }, OwnerRef::User { handle: b }) => {
                a.eq_ignore_ascii_case(b)
            }
            (OwnerRef::Team { slug: a }, OwnerRef::Team { slug: b }) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl Eq for OwnerRef {}

impl Hash for OwnerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            OwnerRef::User { handle } => {
                state.write_u8(0);
                for b in handle.bytes() {
                    state.write_u8(b.to_ascii_lowercase());
                }
            }
            OwnerRef::Team { slug } => {
                state.write_u8(1);
                for b in slug.bytes() {
                    state.write_u8(b.to_ascii_lowercase());
                }
            }
        }
    }
}
