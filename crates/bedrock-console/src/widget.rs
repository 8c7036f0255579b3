//! Console widgets.

/// A widget contributes one path-to-content mapping to the console.
///
/// Widgets are mounted when the console starts and stay mounted for its
/// lifetime; each `GET` on the widget's path calls [`Widget::render`] for a
/// fresh text body (a metrics exposition page, a status dump, and so on).
pub trait Widget: Send + Sync {
    /// Route the widget serves.
    ///
    /// Must start with `/`, be unique among the console's widgets, stay
    /// clear of the built-in `/healthz`, and use no route parameter syntax;
    /// the console rejects the whole set at start time otherwise.
    fn path(&self) -> &str;

    /// Produces the response body for one request.
    fn render(&self) -> String;
}
