use strum::{AsRefStr, Display};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin = 1,
    Principal = 2,
    Teacher = 3,
    System = 4,
    Staff = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Principal),
            3 => Some(Role::Teacher),
            4 => Some(Role::System),
            5 => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_round_trip() {
        for role in [Role::Admin, Role::Principal, Role::Teacher, Role::System, Role::Staff] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::Principal.as_ref(), "PRINCIPAL");
        assert_eq!(Role::Staff.to_string(), "STAFF");
    }

    #[test]
    fn test_unknown_role_id() {
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }
}
