/// One semantic step of a data path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPart {
    /// Named member lookup
    ///
    /// # Examples
    /// ```text
    /// name        // DataPath("name")
    /// a.b         // DataPath("a"), DataPath("b")
    /// ```
    DataPath(String),

    /// Jump to the outermost context (`~`)
    RootSelector,

    /// Jump to the nearest natural enclosing context (`../`)
    ParentSelector,

    /// The current context (`.` on its own)
    SelfAssignment,

    /// The current context (`this`)
    ThisPath,

    /// Enumerate the members of the current value (`?`)
    ObjectSelector,

    /// Null literal (`null`)
    Null,

    /// Boolean literal (`true` / `false`)
    Boolean(bool),
}

impl PathPart {
    /// Parts that may only start a path.
    pub fn must_be_first(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::RootSelector | Self::ThisPath | Self::Boolean(_)
        )
    }
}
