use safepath_core::CellCoord;

/// Result of moving a requested cell onto walkable ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Snap {
    /// The requested cell was already walkable.
    Walkable(CellCoord),
    /// The requested cell was blocked and a nearby walkable cell replaced it.
    Relocated {
        /// Cell that was originally requested.
        from: CellCoord,
        /// Walkable cell used instead.
        to: CellCoord,
    },
    /// No walkable cell exists within the ring limit; the original cell is kept.
    Unresolved(CellCoord),
}

impl Snap {
    /// Cell the search should use.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        match *self {
            Self::Walkable(cell) | Self::Unresolved(cell) => cell,
            Self::Relocated { to, .. } => to,
        }
    }
}

/// Finds the walkable cell closest to `origin` by scanning square rings.
///
/// Rings grow from radius 1 to `max_radius`. Within a ring the top and bottom
/// edges are scanned left to right first (upper cell before lower), followed by
/// the remaining right and left edge cells from bottom to top.
pub fn nearest_walkable<F>(origin: CellCoord, max_radius: i32, mut is_walkable: F) -> Snap
where
    F: FnMut(CellCoord) -> bool,
{
    if is_walkable(origin) {
        return Snap::Walkable(origin);
    }

    for radius in 1..=max_radius {
        for dx in -radius..=radius {
            for dz in [radius, -radius] {
                let candidate = origin.offset(dx, dz);
                if is_walkable(candidate) {
                    return Snap::Relocated {
                        from: origin,
                        to: candidate,
                    };
                }
            }
        }
        for dz in (-radius + 1)..radius {
            for dx in [radius, -radius] {
                let candidate = origin.offset(dx, dz);
                if is_walkable(candidate) {
                    return Snap::Relocated {
                        from: origin,
                        to: candidate,
                    };
                }
            }
        }
    }

    Snap::Unresolved(origin)
}
