//! DVB time encodings (EN 300 468 Annex C): a 16-bit Modified Julian Date
//! followed by hours, minutes and seconds as BCD byte pairs.

use bitfield::bcd;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// Size of an MJD + BCD UTC time field.
pub const UTC_TIME_SIZE: usize = 5;
/// Size of a BCD hh:mm:ss duration.
pub const BCD_DURATION_SIZE: usize = 3;

/// Day zero of the Modified Julian Date.
const MJD_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1858, 11, 17) {
    Some(date) => date,
    None => panic!("1858-11-17 is a valid date"),
};

/// Calendar date of a Modified Julian Date.
pub fn mjd_to_date(mjd: u16) -> Option<NaiveDate> {
    MJD_EPOCH.checked_add_days(Days::new(mjd as u64))
}

/// Modified Julian Date of a calendar date, if it fits 16 bits.
pub fn date_to_mjd(date: NaiveDate) -> Option<u16> {
    u16::try_from(date.signed_duration_since(MJD_EPOCH).num_days()).ok()
}

/// Decode three BCD bytes `hh mm ss`.
pub fn decode_bcd_hms(bytes: [u8; 3]) -> Option<(u8, u8, u8)> {
    Some((
        bcd::decode_byte(bytes[0])?,
        bcd::decode_byte(bytes[1])?,
        bcd::decode_byte(bytes[2])?,
    ))
}

/// Encode hours, minutes and seconds as three BCD bytes.
pub fn encode_bcd_hms(hours: u8, minutes: u8, seconds: u8) -> Option<[u8; 3]> {
    Some([
        bcd::encode_byte(hours)?,
        bcd::encode_byte(minutes)?,
        bcd::encode_byte(seconds)?,
    ])
}

/// Decode a BCD duration such as an EIT event duration.
pub fn decode_duration(bytes: [u8; 3]) -> Option<TimeDelta> {
    let (h, m, s) = decode_bcd_hms(bytes)?;
    TimeDelta::try_seconds(h as i64 * 3600 + m as i64 * 60 + s as i64)
}

/// Encode a duration below 100 hours as BCD hh:mm:ss.
pub fn encode_duration(duration: TimeDelta) -> Option<[u8; 3]> {
    let total = u64::try_from(duration.num_seconds()).ok()?;
    let hours = u8::try_from(total / 3600).ok()?;
    encode_bcd_hms(hours, (total / 60 % 60) as u8, (total % 60) as u8)
}

/// Decode a 40-bit UTC time. All-ones marks an undefined time and yields
/// `None`, as does any invalid BCD digit or out-of-range field.
pub fn decode_utc_time(bytes: &[u8]) -> Option<NaiveDateTime> {
    let bytes: &[u8; UTC_TIME_SIZE] = bytes.get(..UTC_TIME_SIZE)?.try_into().ok()?;
    if bytes.iter().all(|&b| b == 0xFF) {
        return None;
    }
    let date = mjd_to_date(u16::from_be_bytes([bytes[0], bytes[1]]))?;
    let (h, m, s) = decode_bcd_hms([bytes[2], bytes[3], bytes[4]])?;
    let time = NaiveTime::from_hms_opt(h as u32, m as u32, s as u32)?;
    Some(date.and_time(time))
}

/// Encode a UTC time into 5 bytes.
pub fn encode_utc_time(time: NaiveDateTime) -> Option<[u8; UTC_TIME_SIZE]> {
    let mjd = date_to_mjd(time.date())?.to_be_bytes();
    let hms = encode_bcd_hms(time.hour() as u8, time.minute() as u8, time.second() as u8)?;
    Some([mjd[0], mjd[1], hms[0], hms[1], hms[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annex_c_example() {
        // 93/10/13 12:45:00
        let bytes = [0xC0, 0x79, 0x12, 0x45, 0x00];
        let time = decode_utc_time(&bytes).unwrap();
        assert_eq!(time.date(), NaiveDate::from_ymd_opt(1993, 10, 13).unwrap());
        assert_eq!((time.hour(), time.minute(), time.second()), (12, 45, 0));
        assert_eq!(encode_utc_time(time), Some(bytes));
    }

    #[test]
    fn test_bcd_hour() {
        assert_eq!(decode_bcd_hms([0x21, 0x00, 0x00]), Some((21, 0, 0)));
        assert_eq!(decode_bcd_hms([0x2A, 0x00, 0x00]), None);
    }

    #[test]
    fn test_mjd_round_trip_dates() {
        assert_eq!(mjd_to_date(0), NaiveDate::from_ymd_opt(1858, 11, 17));
        assert_eq!(mjd_to_date(u16::MAX), NaiveDate::from_ymd_opt(2038, 4, 22));
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mjd = date_to_mjd(date).unwrap();
        assert_eq!(mjd, 60369);
        assert_eq!(mjd_to_date(mjd), Some(date));
        assert_eq!(date_to_mjd(NaiveDate::from_ymd_opt(1800, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_duration() {
        let duration = decode_duration([0x01, 0x45, 0x30]).unwrap();
        assert_eq!(duration.num_seconds(), 3600 + 45 * 60 + 30);
        assert_eq!(encode_duration(duration), Some([0x01, 0x45, 0x30]));
        assert_eq!(encode_duration(TimeDelta::hours(100)), None);
    }

    #[test]
    fn test_undefined_time() {
        assert_eq!(decode_utc_time(&[0xFF; 5]), None);
        assert_eq!(decode_utc_time(&[0xC0, 0x79, 0x25, 0x00, 0x00]), None);
        assert_eq!(decode_utc_time(&[0xC0, 0x79]), None);
    }
}
