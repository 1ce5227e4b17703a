/// Identity of whoever is reading or writing, as resolved by the identity
/// provider. Anonymous viewers carry no id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerContext {
    pub viewer_id: Option<i64>,
}

impl ViewerContext {
    pub fn new(viewer_id: i64) -> Self {
        ViewerContext {
            viewer_id: Some(viewer_id),
        }
    }

    pub fn anonymous() -> Self {
        ViewerContext { viewer_id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.viewer_id.is_some()
    }

    pub fn is(&self, actor_id: i64) -> bool {
        self.viewer_id == Some(actor_id)
    }
}

impl From<Option<i64>> for ViewerContext {
    fn from(viewer_id: Option<i64>) -> Self {
        ViewerContext { viewer_id }
    }
}
