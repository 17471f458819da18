//! Input routing: area checkers, pointer samples and the router.

mod area;
mod pointer;
mod router;

pub use area::{AreaChecker, CircleArea, PolygonArea, RectArea, TriangleArea};
pub use pointer::{GesturePhase, GestureState, PointerEvent, PointerId};
pub use router::{
    Callback, Dispatch, Handlers, InputRouter, Predicate, RegistrationId, RouterConfig,
};
