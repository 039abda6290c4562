use std::fmt::Write as _;
use std::net::Ipv4Addr;

use binbuf::prelude::*;

#[derive(Debug, Clone)]
pub struct Addrs {
    /// Client IP address, filled in by the client if it already has one.
    pub ciaddr: Ipv4Addr,

    /// 'Your' (client) IP address, assigned by the server.
    pub yiaddr: Ipv4Addr,

    /// Address of the next server to use in the bootstrap.
    pub siaddr: Ipv4Addr,

    /// Relay agent IP address.
    pub giaddr: Ipv4Addr,

    /// Client hardware address plus padding (16 octets total).
    pub chaddr: [u8; 16],
}

impl Default for Addrs {
    fn default() -> Self {
        Self {
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
        }
    }
}

impl Addrs {
    /// Render the first six bytes of `chaddr` as a lowercase colon-separated
    /// MAC address, the form entitlement lists are matched against.
    pub fn mac_string(&self) -> String {
        let mut mac = String::with_capacity(17);
        for (i, byte) in self.chaddr[..6].iter().enumerate() {
            if i > 0 {
                mac.push(':');
            }
            let _ = write!(mac, "{byte:02x}");
        }
        mac
    }
}

impl Readable for Addrs {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer<'_>) -> Result<Self, Self::Error> {
        let [ciaddr, yiaddr, siaddr, giaddr] = u32::read_multi::<E, 4>(buf)?;
        let chaddr = buf.read_array::<16>()?;

        Ok(Self {
            ciaddr: Ipv4Addr::from(ciaddr),
            yiaddr: Ipv4Addr::from(yiaddr),
            siaddr: Ipv4Addr::from(siaddr),
            giaddr: Ipv4Addr::from(giaddr),
            chaddr,
        })
    }
}

impl Writeable for Addrs {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += u32::from(self.ciaddr).write::<E>(buf)?;
        n += u32::from(self.yiaddr).write::<E>(buf)?;
        n += u32::from(self.siaddr).write::<E>(buf)?;
        n += u32::from(self.giaddr).write::<E>(buf)?;
        n += self.chaddr.as_slice().write::<E>(buf)?;

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_string_is_zero_padded() {
        let mut addrs = Addrs::default();
        addrs.chaddr[..6].copy_from_slice(&[0x0a, 0xbb, 0x0c, 0xdd, 0x0e, 0xff]);

        assert_eq!(addrs.mac_string(), "0a:bb:0c:dd:0e:ff");
    }
}
