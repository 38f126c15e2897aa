/// The fixed set of housing communities that listings and follows are scoped
/// by. Follows reference a community by its display name; anything outside
/// this set is rejected at the validation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Community {
    Baker,
    BurtonConner,
    EastCampus,
    MacGregor,
    Maseeh,
    McCormick,
    NewHouse,
    NewVassar,
    NextHouse,
    Random,
    Simmons,
    Tang,
    Westgate,
}

impl Community {
    pub const ALL: [Community; 13] = [
        Community::Baker,
        Community::BurtonConner,
        Community::EastCampus,
        Community::MacGregor,
        Community::Maseeh,
        Community::McCormick,
        Community::NewHouse,
        Community::NewVassar,
        Community::NextHouse,
        Community::Random,
        Community::Simmons,
        Community::Tang,
        Community::Westgate,
    ];

    /// Display name, also the persisted representation.
    pub fn name(&self) -> &'static str {
        match self {
            Community::Baker => "Baker",
            Community::BurtonConner => "Burton Conner",
            Community::EastCampus => "East Campus",
            Community::MacGregor => "MacGregor",
            Community::Maseeh => "Maseeh",
            Community::McCormick => "McCormick",
            Community::NewHouse => "New House",
            Community::NewVassar => "New Vassar",
            Community::NextHouse => "Next House",
            Community::Random => "Random",
            Community::Simmons => "Simmons",
            Community::Tang => "Tang",
            Community::Westgate => "Westgate",
        }
    }

    /// Resolve a community from its exact display name.
    pub fn parse(name: &str) -> Option<Community> {
        Community::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn is_valid_name(name: &str) -> bool {
        Community::parse(name).is_some()
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_names_round_trip() {
        assert_eq!(Community::ALL.len(), 13);
        for community in Community::ALL {
            assert_eq!(Community::parse(community.name()), Some(community));
        }
    }

    #[test]
    fn rejects_unknown_and_near_miss_names() {
        assert!(!Community::is_valid_name(""));
        assert!(!Community::is_valid_name("maseeh"));
        assert!(!Community::is_valid_name("Maseeh "));
        assert!(!Community::is_valid_name("Senior House"));
    }
}
