use serde_json::Value;

use crate::claims::sequence;
use crate::claims::Claims;
use crate::claims::Identity;
use crate::error::template_error;
use crate::error::RenderError;
use crate::template::Template;

/// Per-issuer mapping from token claims to a cluster identity
///
/// `uid` and `username` are rendered with the whole claim set as root
/// context. The claim named by `groups_field` must be an array; `group` is
/// rendered once per element with that element as root context.
#[derive(Debug, Clone)]
pub struct ClaimTemplate {
    pub uid: Template,
    pub username: Template,
    pub group: Template,
    pub groups_field: String,
}

impl ClaimTemplate {
    pub fn new(
        uid: Template,
        username: Template,
        group: Template,
        groups_field: impl Into<String>,
    ) -> Self {
        Self {
            uid,
            username,
            group,
            groups_field: groups_field.into(),
        }
    }

    /// Render an identity from `claims`
    ///
    /// The validator only calls this with the claims of a token whose
    /// signature, issuer and temporal claims have been checked.
    pub fn render(&self, claims: &Claims) -> Result<Identity, RenderError> {
        // Templates take a JSON value as root context
        let root = Value::Object(claims.clone());

        let uid = self.uid.execute(&root).map_err(template_error("uid"))?;
        let username = self.username.execute(&root).map_err(template_error("username"))?;

        let groups = sequence(claims, &self.groups_field)?
            .iter()
            .map(|item| self.group.execute(item).map_err(template_error("group")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Identity {
            uid,
            username,
            groups,
        })
    }
}
