use uuid::Uuid;

/**
 * Advertised names of the wand look like Kano-Wand-XX-XX-XX.
 */
pub const WAND_NAME_PREFIX: &str = "Kano-Wand";

/**
 * Default timeout (milliseconds) for scanning, connecting and other device operations.
 */
pub const DEFAULT_TIMEOUT: u64 = 10_000;

/**
 * How often (milliseconds) to look through the discovered peripherals while scanning.
 */
pub const SCAN_POLL_DELAY: u64 = 250;

/**
 * Capacity of the channel between a transport notification callback and a stream.
 * The forwarding loop is expected to keep up, so one slot gives natural backpressure.
 */
pub const DELIVERY_CHANNEL_CAPACITY: usize = 1;

// Information service
pub const INFORMATION_SERVICE: Uuid = Uuid::from_u128(0x64a70010_f691_4b93_a6f4_0968f5b648f8);
pub const INFORMATION_ORGANISATION_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000b_f691_4b93_a6f4_0968f5b648f8);
pub const INFORMATION_SOFTWARE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70013_f691_4b93_a6f4_0968f5b648f8);
pub const INFORMATION_HARDWARE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70001_f691_4b93_a6f4_0968f5b648f8);

// IO service
pub const IO_SERVICE: Uuid = Uuid::from_u128(0x64a70012_f691_4b93_a6f4_0968f5b648f8);
pub const IO_BATTERY_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70007_f691_4b93_a6f4_0968f5b648f8);
pub const IO_USER_BUTTON_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000d_f691_4b93_a6f4_0968f5b648f8);
pub const IO_VIBRATOR_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70008_f691_4b93_a6f4_0968f5b648f8);
pub const IO_LED_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70009_f691_4b93_a6f4_0968f5b648f8);
pub const IO_KEEP_ALIVE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000f_f691_4b93_a6f4_0968f5b648f8);

// Sensor service
pub const SENSOR_SERVICE: Uuid = Uuid::from_u128(0x64a70011_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_QUATERNIONS_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70002_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_RAW_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000a_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_MOTION_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a7000c_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_MAGN_CALIBRATE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70021_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_QUATERNIONS_RESET_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70004_f691_4b93_a6f4_0968f5b648f8);
pub const SENSOR_TEMPERATURE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x64a70014_f691_4b93_a6f4_0968f5b648f8);

/**
 * The standard GATT "Service Changed" characteristic (0x2A05).
 */
pub const SERVICE_CHANGED_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00002a05_0000_1000_8000_00805f9b34fb);

/**
 * Apple specific characteristic exposed by some stacks (property WN, only a CCCD).
 */
pub const APPLE_RESERVED_CHARACTERISTIC: Uuid = Uuid::from_u128(0x8667556c_9a37_4c91_84ed_54ee27d90049);

/**
 * Characteristics that are never subscribed to, even when requested explicitly.
 */
pub const SUBSCRIBE_DENYLIST: [Uuid; 2] = [SERVICE_CHANGED_CHARACTERISTIC, APPLE_RESERVED_CHARACTERISTIC];

pub fn is_denylisted(uuid: &Uuid) -> bool {
    SUBSCRIBE_DENYLIST.contains(uuid)
}

const KNOWN_NAMES: [(Uuid, &str); 18] = [
    (INFORMATION_SERVICE, "Information Service"),
    (INFORMATION_ORGANISATION_CHARACTERISTIC, "Organisation"),
    (INFORMATION_SOFTWARE_CHARACTERISTIC, "Software Version"),
    (INFORMATION_HARDWARE_CHARACTERISTIC, "Hardware Build"),
    (IO_SERVICE, "IO Service"),
    (IO_BATTERY_CHARACTERISTIC, "Battery"),
    (IO_USER_BUTTON_CHARACTERISTIC, "User Button"),
    (IO_VIBRATOR_CHARACTERISTIC, "Vibrator"),
    (IO_LED_CHARACTERISTIC, "LED"),
    (IO_KEEP_ALIVE_CHARACTERISTIC, "Keep Alive"),
    (SENSOR_SERVICE, "Sensor Service"),
    (SENSOR_QUATERNIONS_CHARACTERISTIC, "Quaternions"),
    (SENSOR_RAW_CHARACTERISTIC, "Raw Sensor"),
    (SENSOR_MOTION_CHARACTERISTIC, "Motion"),
    (SENSOR_MAGN_CALIBRATE_CHARACTERISTIC, "Magnetometer Calibrate"),
    (SENSOR_QUATERNIONS_RESET_CHARACTERISTIC, "Quaternions Reset"),
    (SENSOR_TEMPERATURE_CHARACTERISTIC, "Temperature"),
    (SERVICE_CHANGED_CHARACTERISTIC, "Service Changed"),
];

/**
 * A human readable name for the services and characteristics we know about, used in logs.
 */
pub fn uuid_name(uuid: &Uuid) -> &'static str {
    KNOWN_NAMES
        .iter()
        .find(|(known, _)| known == uuid)
        .map(|(_, name)| *name)
        .unwrap_or("")
}
