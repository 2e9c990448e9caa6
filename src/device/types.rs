use std::fmt;
use uuid::Uuid;

/**
 * Opaque name of one connected peripheral, derived from its physical address.
 * Streaming calls must present the identifier of the active session.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn from_address(address: &str) -> Self {
        Identifier(address.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, uid: &str) -> bool {
        self.0 == uid
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Properties {
    pub broadcast: bool,
    pub read: bool,
    pub write_without_response: bool,
    pub write: bool,
    pub notify: bool,
    pub indicate: bool,
    pub signed_write: bool,
    pub extended: bool,
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.broadcast, 'B'),
            (self.read, 'R'),
            (self.write_without_response, 'w'),
            (self.write, 'W'),
            (self.notify, 'N'),
            (self.indicate, 'I'),
            (self.signed_write, 'S'),
            (self.extended, 'E'),
        ];

        for (set, letter) in flags {
            if set {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub service_uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub service_uuid: Uuid,
    pub properties: Properties,
    pub descriptors: Vec<Descriptor>,
}

impl Characteristic {
    pub fn can_notify(&self) -> bool {
        self.properties.notify
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub uuid: Uuid,
    pub characteristics: Vec<Characteristic>,
}

/**
 * The service/characteristic tree of a peripheral. Read-only once discovered.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub services: Vec<Service>,
}

impl Profile {
    pub fn characteristics(&self) -> impl Iterator<Item = (&Service, &Characteristic)> {
        self.services
            .iter()
            .flat_map(|service| service.characteristics.iter().map(move |c| (service, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_stable_for_the_same_address() {
        let a = Identifier::from_address("D1:4C:2A:00:11:22");
        let b = Identifier::from_address("D1:4C:2A:00:11:22");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "D1:4C:2A:00:11:22");
        assert!(a.matches("D1:4C:2A:00:11:22"));
        assert!(!a.matches("d1:4c:2a:00:11:22"));
    }

    #[test]
    fn properties_render_as_flag_letters() {
        let properties = Properties { read: true, notify: true, ..Properties::default() };
        assert_eq!(properties.to_string(), "RN");
        assert_eq!(Properties::default().to_string(), "");
    }
}
