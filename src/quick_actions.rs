/// A predefined message the user can send with a single key press or click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub id: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
    pub message: &'static str,
}

/// The fixed catalog, in display order.
pub const QUICK_ACTIONS: [QuickAction; 3] = [
    QuickAction {
        id: "location",
        icon: "📍",
        label: "IT Office Location",
        message: "Where is the IT office located and what are the extensions?",
    },
    QuickAction {
        id: "lockout",
        icon: "🔒",
        label: "Portal Lockout Help",
        message: "My portal account is locked, what should I do?",
    },
    QuickAction {
        id: "leave",
        icon: "📄",
        label: "Apply for Leave",
        message: "Show me the steps to apply for employee leave.",
    },
];

impl QuickAction {
    pub fn by_index(index: usize) -> Option<&'static QuickAction> {
        QUICK_ACTIONS.get(index)
    }

    pub fn by_id(id: &str) -> Option<&'static QuickAction> {
        QUICK_ACTIONS.iter().find(|action| action.id == id)
    }

    /// Text shown on the rendered button, e.g. `📍 IT Office Location`
    pub fn button_text(&self) -> String {
        format!("{} {}", self.icon, self.label)
    }
}
