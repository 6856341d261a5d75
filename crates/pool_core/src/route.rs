//! Directed routes. Rides and waitlist entries are only ever compared inside
//! the bucket of their own route.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A pick-up or drop-off point, as a small code (A = 0, B = 1, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location(pub u32);

/// Directed origin → destination pair. `A → B` and `B → A` are different buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: Location,
    pub destination: Location,
}

impl RouteKey {
    pub fn new(origin: Location, destination: Location) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Route in the opposite direction.
    pub fn reversed(self) -> Self {
        Self {
            origin: self.destination,
            destination: self.origin,
        }
    }
}

impl From<(u32, u32)> for RouteKey {
    fn from((origin, destination): (u32, u32)) -> Self {
        Self::new(Location(origin), Location(destination))
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin.0, self.destination.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_matters() {
        let ab = RouteKey::from((0, 1));
        assert_ne!(ab, ab.reversed());
        assert_eq!(ab, ab.reversed().reversed());
        assert_eq!(ab.to_string(), "0->1");
    }

    #[test]
    fn orders_by_origin_then_destination() {
        let mut routes = vec![
            RouteKey::from((1, 2)),
            RouteKey::from((0, 2)),
            RouteKey::from((0, 1)),
        ];
        routes.sort();
        assert_eq!(
            routes,
            vec![
                RouteKey::from((0, 1)),
                RouteKey::from((0, 2)),
                RouteKey::from((1, 2)),
            ]
        );
    }
}
