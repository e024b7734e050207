//! Support level and ghost-cell requirements.

/// How much cut-cell information the geometry must provide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum EbSupport {
    /// Cell flags only.
    Basic,
    /// Flags and volume fractions.
    Volume,
    /// Flags, volume fractions, and face-area fractions.
    #[default]
    Full,
}

/// Ghost cells the geometry must cover at each support level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EbGrowCells {
    /// Grow cells for [`EbSupport::Basic`].
    pub basic: usize,
    /// Grow cells for [`EbSupport::Volume`].
    pub volume: usize,
    /// Grow cells for [`EbSupport::Full`].
    pub full: usize,
}

impl EbGrowCells {
    /// Same grow count at every support level.
    pub const fn uniform(n: usize) -> Self {
        Self {
            basic: n,
            volume: n,
            full: n,
        }
    }

    /// Grow cells needed at `support`.
    pub fn required_grow(&self, support: EbSupport) -> usize {
        match support {
            EbSupport::Basic => self.basic,
            EbSupport::Volume => self.volume,
            EbSupport::Full => self.full,
        }
    }
}

impl Default for EbGrowCells {
    fn default() -> Self {
        Self::uniform(5)
    }
}
