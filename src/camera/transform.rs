use glam::{Mat4, Quat, Vec3};

/// Host-side model-view transform stack.
///
/// The cumulative transform is always `view * model`. `push`/`pop` save and
/// restore the model part; the view (camera) part is replaced with
/// [`TransformStack::set_view`].
#[derive(Debug, Clone)]
pub struct TransformStack {
    view: Mat4,
    model: Mat4,
    saved: Vec<Mat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl TransformStack {
    /// Create a stack with the given camera view matrix and identity model.
    #[must_use]
    pub fn new(view: Mat4) -> Self {
        Self {
            view,
            model: Mat4::IDENTITY,
            saved: Vec::new(),
        }
    }

    /// Replace the camera view matrix.
    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Point the camera from `eye` at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.view = Mat4::look_at_rh(eye, target, up);
    }

    /// Current cumulative model-view transform.
    #[must_use]
    pub fn current(&self) -> Mat4 {
        self.view * self.model
    }

    /// Save the current model transform.
    pub fn push(&mut self) {
        self.saved.push(self.model);
    }

    /// Restore the most recently saved model transform.
    ///
    /// Returns `false` (and leaves the transform untouched) on underflow.
    pub fn pop(&mut self) -> bool {
        match self.saved.pop() {
            Some(model) => {
                self.model = model;
                true
            }
            None => {
                log::warn!("transform stack underflow; pop ignored");
                false
            }
        }
    }

    /// Nesting depth of saved transforms.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Reset the model transform and drop saved entries.
    pub fn reset(&mut self) {
        self.model = Mat4::IDENTITY;
        self.saved.clear();
    }

    /// Post-multiply a translation.
    pub fn translate(&mut self, offset: Vec3) {
        self.model *= Mat4::from_translation(offset);
    }

    /// Post-multiply a rotation.
    pub fn rotate(&mut self, rotation: Quat) {
        self.model *= Mat4::from_quat(rotation);
    }

    /// Post-multiply a scale.
    pub fn scale(&mut self, factor: Vec3) {
        self.model *= Mat4::from_scale(factor);
    }

    /// Post-multiply an arbitrary matrix.
    pub fn apply(&mut self, matrix: Mat4) {
        self.model *= matrix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_restores_model() {
        let mut stack = TransformStack::default();
        stack.translate(Vec3::new(1.0, 2.0, 3.0));
        stack.push();
        stack.translate(Vec3::new(0.0, 0.0, -10.0));
        assert_eq!(
            stack.current().w_axis.truncate(),
            Vec3::new(1.0, 2.0, -7.0)
        );
        assert!(stack.pop());
        assert_eq!(
            stack.current().w_axis.truncate(),
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn pop_underflow_is_ignored() {
        let mut stack = TransformStack::default();
        stack.translate(Vec3::X);
        assert!(!stack.pop());
        assert_eq!(stack.current().w_axis.truncate(), Vec3::X);
    }

    #[test]
    fn view_applies_after_model() {
        let mut stack = TransformStack::default();
        stack.look_at(Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO, Vec3::Y);
        stack.translate(Vec3::new(0.0, 0.0, -50.0));
        let origin = stack.current().transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -100.0)).length() < 1e-4);
    }
}
