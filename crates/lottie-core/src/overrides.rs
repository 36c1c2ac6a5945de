use crate::color::Color;
use crate::keypath::ContentId;
use std::collections::HashMap;

/// Value forced onto a content node in place of its animated one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyOverride {
    Color(Color),
    /// Percent, `0..=100`, like the document's own opacity values.
    Opacity(f32),
    StrokeWidth(f32),
}

/// Overrides in effect for one content node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverrideSet {
    pub color: Option<Color>,
    pub opacity: Option<f32>,
    pub stroke_width: Option<f32>,
}

impl OverrideSet {
    fn apply(&mut self, value: PropertyOverride) {
        match value {
            PropertyOverride::Color(c) => self.color = Some(c),
            PropertyOverride::Opacity(o) => self.opacity = Some(o.clamp(0.0, 100.0)),
            PropertyOverride::StrokeWidth(w) => self.stroke_width = Some(w.max(0.0)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    entries: HashMap<ContentId, OverrideSet>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, target: ContentId, value: PropertyOverride) {
        self.entries.entry(target).or_default().apply(value);
    }

    pub fn get(&self, target: ContentId) -> Option<&OverrideSet> {
        self.entries.get(&target)
    }

    pub fn color(&self, target: ContentId) -> Option<Color> {
        self.get(target).and_then(|o| o.color)
    }

    /// Opacity override as a `0..=1` factor.
    pub fn opacity(&self, target: ContentId) -> Option<f32> {
        self.get(target).and_then(|o| o.opacity).map(|o| o / 100.0)
    }

    pub fn stroke_width(&self, target: ContentId) -> Option<f32> {
        self.get(target).and_then(|o| o.stroke_width)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_override_of_same_kind_wins() {
        let mut overrides = Overrides::new();
        let id = ContentId(4);
        overrides.set(id, PropertyOverride::Color(Color::WHITE));
        overrides.set(id, PropertyOverride::Opacity(50.0));
        overrides.set(id, PropertyOverride::Color(Color::BLACK));

        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.color(id), Some(Color::BLACK));
        assert_eq!(overrides.opacity(id), Some(0.5));
        assert_eq!(overrides.stroke_width(id), None);
        assert!(overrides.get(ContentId(5)).is_none());
    }

    #[test]
    fn test_values_are_clamped() {
        let mut overrides = Overrides::new();
        overrides.set(ContentId(1), PropertyOverride::Opacity(250.0));
        overrides.set(ContentId(1), PropertyOverride::StrokeWidth(-3.0));
        assert_eq!(overrides.opacity(ContentId(1)), Some(1.0));
        assert_eq!(overrides.stroke_width(ContentId(1)), Some(0.0));

        overrides.clear();
        assert!(overrides.is_empty());
    }
}
