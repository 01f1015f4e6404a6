use crate::formula::expr::py_str;

/// Value recorded for one output entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    /// A single variable
    Single(String),
    /// Column members; empty members are dropped when the program runs
    Column(Vec<String>),
}

impl OutputValue {
    pub fn render(&self) -> String {
        match self {
            OutputValue::Single(var) => var.clone(),
            OutputValue::Column(vars) => format!("[e for e in [{}] if e != '']", vars.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    /// Section labels, outermost first
    pub path: Vec<String>,
    pub label: String,
    pub value: OutputValue,
}

impl OutputEntry {
    /// `add_path([...], 'label', value, results)`
    pub fn render(&self) -> String {
        let path: Vec<String> = self.path.iter().map(|p| py_str(p)).collect();
        format!("add_path([{}], {}, {}, results)", path.join(", "), py_str(&self.label), self.value.render())
    }
}

/// Ordered result entries of one translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMapping {
    entries: Vec<OutputEntry>,
}

impl OutputMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: Vec<String>, label: impl Into<String>, value: OutputValue) {
        self.entries.push(OutputEntry { path, label: label.into(), value });
    }

    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
