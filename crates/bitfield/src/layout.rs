/// Declare a zero-copy view over a fixed-layout record from a field table.
///
/// ```
/// bitfield::layout! {
///     /// Four-byte MPEG-2 TS packet header.
///     pub struct Header[4] {
///         /// 13-bit packet identifier.
///         pid, set_pid: u16 = (1, 3, 13);
///         continuity_counter, set_continuity_counter: u8 = (3, 4, 4);
///     }
/// }
///
/// let mut bytes = [0x47, 0x41, 0x00, 0x10];
/// let mut header = Header::new(&mut bytes[..]).unwrap();
/// assert_eq!(header.pid(), 0x0100);
/// header.set_continuity_counter(5);
/// assert_eq!(bytes[3], 0x15);
/// ```
///
/// Each entry is `getter, setter: type = (byte, bit, width)`. `new` checks
/// the buffer holds at least the bracketed minimum length once, so the
/// generated accessors cannot run out of bounds afterwards. Declaring a field
/// past the minimum length fails to compile.
#[macro_export]
macro_rules! layout {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident [$min:expr] {
            $(
                $(#[$fmeta:meta])*
                $get:ident, $set:ident : $ty:ty = ($off:expr, $bit:expr, $width:expr);
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $name<B> {
            buf: B,
        }

        impl<B> $name<B> {
            /// Smallest buffer the fixed part of the layout fits in.
            pub const MIN_LEN: usize = $min;

            /// Field table: name and position of every fixed field.
            pub const FIELDS: &'static [(&'static str, $crate::BitField)] = &[
                $( (stringify!($get), $crate::BitField::new($off, $bit, $width)), )*
            ];

            /// Give the buffer back.
            pub fn into_inner(self) -> B {
                self.buf
            }
        }

        impl<B: AsRef<[u8]>> $name<B> {
            /// Wrap `buf`, failing if it is shorter than [`Self::MIN_LEN`].
            pub fn new(buf: B) -> $crate::Result<Self> {
                let available = buf.as_ref().len();
                if available < Self::MIN_LEN {
                    return Err($crate::FieldError::OutOfBounds {
                        needed: Self::MIN_LEN,
                        available,
                    });
                }
                Ok(Self { buf })
            }

            /// The wrapped bytes.
            #[inline]
            pub fn as_bytes(&self) -> &[u8] {
                self.buf.as_ref()
            }

            /// Name and raw value of every fixed field, in declaration order.
            pub fn field_values(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
                Self::FIELDS
                    .iter()
                    .map(move |(name, field)| (*name, field.read(self.buf.as_ref())))
            }

            $(
                $(#[$fmeta])*
                #[inline]
                pub fn $get(&self) -> $ty {
                    <$ty as $crate::FieldValue>::from_bits(
                        $crate::BitField::new($off, $bit, $width).read(self.buf.as_ref()),
                    )
                }
            )*
        }

        impl<B: AsRef<[u8]> + AsMut<[u8]>> $name<B> {
            /// The wrapped bytes, writable.
            #[inline]
            pub fn as_bytes_mut(&mut self) -> &mut [u8] {
                self.buf.as_mut()
            }

            $(
                #[inline]
                pub fn $set(&mut self, value: $ty) {
                    $crate::BitField::new($off, $bit, $width)
                        .write(self.buf.as_mut(), <$ty as $crate::FieldValue>::into_bits(value));
                }
            )*
        }

        const _: () = {
            $(
                assert!(
                    $crate::BitField::new($off, $bit, $width).end() <= $min,
                    concat!(stringify!($name), "::", stringify!($get), " lies past MIN_LEN"),
                );
            )*
        };
    };
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    crate::layout! {
        /// Test layout with fields sharing bytes.
        struct Packed[3] {
            top, set_top: u8 = (0, 0, 3);
            flag, set_flag: bool = (0, 3, 1);
            wide, set_wide: u16 = (0, 4, 12);
            tail, set_tail: u8 = (2, 0, 8);
        }
    }

    #[test]
    fn test_new_rejects_short_buffer() {
        assert!(Packed::new(&[0u8; 2][..]).is_err());
        assert!(Packed::new(&[0u8; 3][..]).is_ok());
    }

    #[test]
    fn test_setters_keep_neighbours() {
        let mut bytes = [0u8; 3];
        let mut view = Packed::new(&mut bytes[..]).unwrap();
        view.set_top(0b101);
        view.set_flag(true);
        view.set_wide(0xABC);
        view.set_tail(0x7E);
        assert_eq!(view.top(), 0b101);
        assert!(view.flag());
        assert_eq!(view.wide(), 0xABC);
        assert_eq!(view.tail(), 0x7E);

        view.set_flag(false);
        assert_eq!(view.top(), 0b101);
        assert_eq!(view.wide(), 0xABC);
        assert_eq!(bytes, [0b1010_1010, 0xBC, 0x7E]);
    }

    #[test]
    fn test_field_table() {
        let bytes = [0xFF, 0xFF, 0x01];
        let view = Packed::new(&bytes[..]).unwrap();
        let values: Vec<_> = view.field_values().collect();
        assert_eq!(
            values,
            vec![("top", 7), ("flag", 1), ("wide", 0xFFF), ("tail", 1)]
        );
        assert_eq!(Packed::<&[u8]>::FIELDS.len(), 4);
    }
}
