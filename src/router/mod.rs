//! Path router.
//!
//! Patterns are literal paths with `<name>` placeholders, e.g. `/user/<name>`.
//! A placeholder captures one or more word characters (letters, digits,
//! underscore), so it never spans a `/` and never matches an empty segment.
//! Matches are anchored at both ends and routes are tried in registration
//! order; the first match wins.
//!
//! Captured values are taken from the raw request path and are not
//! percent-decoded.

use crate::error::{ServerError, ServerResult};
use crate::handler::{Handler, Params};
use crate::http::HttpContext;
use crate::middleware::Middleware;
use regex::Regex;
use std::sync::Arc;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pattern: String,
    regex: Regex,
    names: Vec<String>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> ServerResult<Self> {
        let mut source = String::from("^");
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut placeholder: Option<String> = None;

        for c in pattern.chars() {
            match (c, placeholder.as_mut()) {
                ('<', Some(_)) => {
                    return Err(ServerError::invalid_route(pattern, "nested placeholder"));
                }
                ('<', None) => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    placeholder = Some(String::new());
                }
                ('>', Some(name)) => {
                    Self::check_name(pattern, name, &names)?;
                    source.push_str(&format!(r"(?P<{}>\w+)", name));
                    names.push(std::mem::take(name));
                    placeholder = None;
                }
                ('>', None) => {
                    return Err(ServerError::invalid_route(pattern, "unbalanced `>`"));
                }
                (c, Some(name)) => name.push(c),
                (c, None) => literal.push(c),
            }
        }
        if placeholder.is_some() {
            return Err(ServerError::invalid_route(pattern, "unclosed placeholder"));
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|err| ServerError::invalid_route(pattern, err.to_string()))?;
        Ok(Self {
            pattern: pattern.to_owned(),
            regex,
            names,
        })
    }

    fn check_name(pattern: &str, name: &str, seen: &[String]) -> ServerResult<()> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => return Err(ServerError::invalid_route(pattern, "empty placeholder name")),
        };
        if !valid {
            return Err(ServerError::invalid_route(
                pattern,
                format!("invalid placeholder name `{}`", name),
            ));
        }
        if seen.iter().any(|seen| seen == name) {
            return Err(ServerError::invalid_route(
                pattern,
                format!("duplicate placeholder `{}`", name),
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the captured placeholders when `path` matches in full.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.clone(), value.as_str().to_owned()))
                })
                .collect(),
        )
    }
}

#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) pattern: RoutePattern,
    pub(crate) handler: Arc<dyn Handler>,
}

/// Ordered route table. Also a chain stage: it claims the request when a
/// route matches and passes otherwise.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Appends a route. Malformed patterns are rejected here so a bad route
    /// table never reaches a running server.
    pub fn register<H: Handler>(&mut self, pattern: &str, handler: H) -> ServerResult<&mut Self> {
        let pattern = RoutePattern::parse(pattern)?;
        tracing::debug!(pattern = pattern.as_str(), "route registered");
        self.routes.push(Route {
            pattern,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the first route matching `path`.
    pub(crate) fn find(&self, path: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }
}

impl Middleware for Router {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        match self.find(ctx.request.path()) {
            Some((route, params)) => {
                route.handler.handle(&ctx.request, &mut ctx.response, &params)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
