// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Closed-interval extent predicates.
//!
//! Kurbo's own [`Rect::contains`] is half-open, which would drop entries that
//! only touch a split line. Everything in this crate uses the closed forms below.

use kurbo::{Point, Rect};

/// Returns `true` if the closed boxes `a` and `b` share at least one point.
#[inline]
#[must_use]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Returns `true` if `inner` lies entirely within `outer` (edges included).
#[inline]
#[must_use]
pub fn contains_rect(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && inner.x1 <= outer.x1 && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
}

/// Returns `true` if `pt` lies within the closed box.
#[inline]
#[must_use]
pub fn contains_point(rect: &Rect, pt: Point) -> bool {
    rect.x0 <= pt.x && pt.x <= rect.x1 && rect.y0 <= pt.y && pt.y <= rect.y1
}

/// Returns `true` if every coordinate of `rect` is finite.
#[inline]
#[must_use]
pub fn is_finite(rect: &Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}
