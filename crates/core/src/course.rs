//! Course map - the fixed, linear ordering of course routes.

use std::collections::HashMap;

/// Errors raised when building a course map.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CourseMapError {
    /// The same route appears twice.
    #[error("duplicate route in course map: {0}")]
    DuplicateRoute(String),

    /// A route normalizes to nothing usable.
    #[error("invalid route: {0:?}")]
    InvalidRoute(String),
}

/// Injective mapping from route to ordinal location, contiguous from 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMap {
    routes: Vec<String>,
    ordinals: HashMap<String, u32>,
}

impl CourseMap {
    /// Build a map where each route's ordinal is its position in `routes`.
    pub fn new<I, S>(routes: I) -> Result<Self, CourseMapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self {
            routes: Vec::new(),
            ordinals: HashMap::new(),
        };

        for raw in routes {
            let route = normalize_route(raw.as_ref());
            if route.contains(char::is_whitespace) {
                return Err(CourseMapError::InvalidRoute(raw.as_ref().to_string()));
            }
            if map.ordinals.contains_key(&route) {
                return Err(CourseMapError::DuplicateRoute(route));
            }
            let ordinal = u32::try_from(map.routes.len())
                .map_err(|_| CourseMapError::InvalidRoute(route.clone()))?;
            map.ordinals.insert(route.clone(), ordinal);
            map.routes.push(route);
        }

        Ok(map)
    }

    /// Ordinal of a route (the route is normalized first).
    pub fn ordinal(&self, route: &str) -> Option<u32> {
        self.ordinals.get(&normalize_route(route)).copied()
    }

    /// Route at an ordinal.
    pub fn route(&self, ordinal: u32) -> Option<&str> {
        self.routes.get(ordinal as usize).map(String::as_str)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the map has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in course order, with their ordinals.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.routes
            .iter()
            .enumerate()
            .map(|(i, r)| (i as u32, r.as_str()))
    }
}

/// Normalize a reported path to its route form.
///
/// Static exports address pages as `/section1/index.html` or `/section1/`;
/// both map to `/section1`. The course root is `/`.
pub fn normalize_route(path: &str) -> String {
    let path = path.trim();
    let path = match path {
        "index.html" => "",
        _ => path.strip_suffix("/index.html").unwrap_or(path),
    };
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseMap {
        CourseMap::new(["/", "/section1", "/summary"]).unwrap()
    }

    #[test]
    fn test_ordinals_follow_declaration_order() {
        let map = course();
        assert_eq!(map.ordinal("/"), Some(0));
        assert_eq!(map.ordinal("/section1"), Some(1));
        assert_eq!(map.ordinal("/summary"), Some(2));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_reverse_lookup() {
        let map = course();
        assert_eq!(map.route(2), Some("/summary"));
        assert_eq!(map.route(3), None);
    }

    #[test]
    fn test_lookup_normalizes_static_export_paths() {
        let map = course();
        assert_eq!(map.ordinal("/section1/"), Some(1));
        assert_eq!(map.ordinal("/section1/index.html"), Some(1));
        assert_eq!(map.ordinal("section1"), Some(1));
        assert_eq!(map.ordinal("/index.html"), Some(0));
        assert_eq!(map.ordinal(""), Some(0));
        assert_eq!(map.ordinal("/missing"), None);
    }

    #[test]
    fn test_duplicate_routes_are_rejected() {
        let err = CourseMap::new(["/", "/a", "/a/"]).unwrap_err();
        assert_eq!(err, CourseMapError::DuplicateRoute("/a".to_string()));
    }

    #[test]
    fn test_whitespace_route_is_rejected() {
        assert!(matches!(
            CourseMap::new(["/", "/a b"]),
            Err(CourseMapError::InvalidRoute(_))
        ));
    }

    #[test]
    fn test_iter_yields_course_order() {
        let map = course();
        let routes: Vec<_> = map.iter().collect();
        assert_eq!(routes, vec![(0, "/"), (1, "/section1"), (2, "/summary")]);
    }
}
