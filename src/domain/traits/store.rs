/// Backing store for the disabled-plugin list
///
/// Holds the raw delimited value (`"trello,other"`), exactly as it would be
/// configured. Readers must call `read` every time they need ground truth;
/// the value changes whenever a plugin is enabled or disabled.
pub trait DisabledListStore: Send + Sync {
    /// Current raw value, `None` when nothing was ever configured
    fn read(&self) -> Option<String>;

    /// Replace the raw value
    fn write(&self, value: String);
}
