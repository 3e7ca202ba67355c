//! Address planning for a fabric: /31 leaf-spine links and positional loopbacks.
//!
//! Everything here is pure arithmetic on the pool's network bits, so the same pool
//! always yields the same addresses in the same order.

use std::net::Ipv4Addr;

use ipnet::{Ipv4Net, Ipv4Subnets};

use crate::error::ComputeError;
use crate::models::{AddressPool, Fabric};

/// Leaves start at this host position of the loopback pool
pub const LEAF_LOOPBACK_OFFSET: usize = 32;
/// Spines sit below the leaf offset, which caps how many a fabric may have
pub const MAX_SPINES: usize = LEAF_LOOPBACK_OFFSET;
pub const LINK_PREFIX: u8 = 31;

const LEAF_HOST_OFFSET: usize = 0;
const SPINE_HOST_OFFSET: usize = 1;

/// Number of `/new_prefix` subnets contained in `net`
pub fn subnet_count(net: &Ipv4Net, new_prefix: u8) -> Result<u64, ComputeError> {
    if new_prefix < net.prefix_len() || new_prefix > 32 {
        return Err(ComputeError::InvalidPrefix { pool: *net, prefix: new_prefix });
    }
    Ok(1u64 << (new_prefix - net.prefix_len()))
}

/// Ordered `/new_prefix` subnets of `net`. Each call starts from the first subnet.
pub fn subnets(net: &Ipv4Net, new_prefix: u8) -> Result<Ipv4Subnets, ComputeError> {
    net.trunc()
        .subnets(new_prefix)
        .map_err(|_| ComputeError::InvalidPrefix { pool: *net, prefix: new_prefix })
}

/// The `index`-th `/new_prefix` subnet of `net`
pub fn subnet_at(
    net: &Ipv4Net,
    new_prefix: u8,
    index: u64,
    purpose: &'static str,
) -> Result<Ipv4Net, ComputeError> {
    let available = subnet_count(net, new_prefix)?;
    let exhausted = ComputeError::AddressExhausted {
        pool: *net,
        purpose,
        required: index + 1,
        available,
    };
    if index >= available {
        return Err(exhausted);
    }
    subnets(net, new_prefix)?.nth(index as usize).ok_or(exhausted)
}

/// Usable host addresses in `net`. /31 and /32 use every address.
pub fn host_count(net: &Ipv4Net) -> u64 {
    let size = 1u64 << (32 - net.prefix_len());
    if net.prefix_len() >= 31 {
        size
    } else {
        size - 2
    }
}

/// The `index`-th usable host of `net`, in ascending order
pub fn host_at(net: &Ipv4Net, index: u64, purpose: &'static str) -> Result<Ipv4Addr, ComputeError> {
    let available = host_count(net);
    if index >= available {
        return Err(ComputeError::AddressExhausted {
            pool: *net,
            purpose,
            required: index + 1,
            available,
        });
    }
    let first = if net.prefix_len() >= 31 {
        u64::from(u32::from(net.network()))
    } else {
        u64::from(u32::from(net.network())) + 1
    };
    Ok(Ipv4Addr::from((first + index) as u32))
}

/// Both usable addresses of a point-to-point subnet, ascending
pub fn host_pair(subnet: &Ipv4Net) -> Result<[Ipv4Addr; 2], ComputeError> {
    Ok([
        host_at(subnet, 0, "point-to-point link")?,
        host_at(subnet, 1, "point-to-point link")?,
    ])
}

/// Addressing of one leaf/spine link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddress {
    pub subnet: Ipv4Net,
    pub leaf: Ipv4Net,
    pub spine: Ipv4Net,
}

/// Planner bound to one fabric's pools and switch counts
#[derive(Debug, Clone, Copy)]
pub struct AddressPlanner<'a> {
    pool: &'a AddressPool,
    spine_count: usize,
    leaf_count: usize,
}

impl<'a> AddressPlanner<'a> {
    pub fn new(fabric: &'a Fabric) -> Result<Self, ComputeError> {
        Self::with_counts(&fabric.pool, fabric.spines.len(), fabric.leaves.len())
    }

    pub fn with_counts(
        pool: &'a AddressPool,
        spine_count: usize,
        leaf_count: usize,
    ) -> Result<Self, ComputeError> {
        if spine_count == 0 {
            return Err(ComputeError::NoSpines);
        }
        if spine_count > MAX_SPINES {
            return Err(ComputeError::TooManySpines { count: spine_count, max: MAX_SPINES });
        }

        // Every switch of the fabric must fit before any of them is addressed
        let links = subnet_count(&pool.links, LINK_PREFIX)?;
        if leaf_count as u64 > links / spine_count as u64 {
            return Err(ComputeError::AddressExhausted {
                pool: pool.links,
                purpose: "leaf-spine links",
                required: (leaf_count * spine_count) as u64,
                available: links,
            });
        }
        let loopbacks = if leaf_count == 0 {
            spine_count
        } else {
            LEAF_LOOPBACK_OFFSET + leaf_count
        };
        let hosts = host_count(&pool.loopbacks);
        if loopbacks as u64 > hosts {
            return Err(ComputeError::AddressExhausted {
                pool: pool.loopbacks,
                purpose: "loopbacks",
                required: loopbacks as u64,
                available: hosts,
            });
        }

        Ok(Self { pool, spine_count, leaf_count })
    }

    /// /31 between spine `spine_index` and leaf `leaf_index`.
    ///
    /// The link pool is cut into one contiguous block per spine; a leaf that does not
    /// fit its spine's block is reported as exhaustion instead of borrowing from the next.
    pub fn link(&self, spine_index: usize, leaf_index: usize) -> Result<LinkAddress, ComputeError> {
        let links = &self.pool.links;
        let total = subnet_count(links, LINK_PREFIX)?;
        let block = total / self.spine_count as u64;
        if leaf_index as u64 >= block {
            return Err(ComputeError::AddressExhausted {
                pool: *links,
                purpose: "leaf-spine links",
                required: self.leaf_count.max(leaf_index + 1) as u64 * self.spine_count as u64,
                available: total,
            });
        }

        let subnet = subnet_at(links, LINK_PREFIX, block * spine_index as u64 + leaf_index as u64, "leaf-spine links")?;
        let hosts = host_pair(&subnet)?;
        let leaf = hosts[LEAF_HOST_OFFSET];
        let spine = hosts[SPINE_HOST_OFFSET];

        Ok(LinkAddress {
            subnet,
            leaf: to_link_net(leaf, &subnet)?,
            spine: to_link_net(spine, &subnet)?,
        })
    }

    pub fn spine_loopback(&self, spine_index: usize) -> Result<Ipv4Addr, ComputeError> {
        self.loopback(spine_index, self.spine_count as u64, "spine loopbacks")
    }

    pub fn leaf_loopback(&self, leaf_index: usize) -> Result<Ipv4Addr, ComputeError> {
        self.loopback(
            LEAF_LOOPBACK_OFFSET + leaf_index,
            (LEAF_LOOPBACK_OFFSET + self.leaf_count.max(leaf_index + 1)) as u64,
            "leaf loopbacks",
        )
    }

    fn loopback(&self, position: usize, required: u64, purpose: &'static str) -> Result<Ipv4Addr, ComputeError> {
        let pool = &self.pool.loopbacks;
        host_at(pool, position as u64, purpose).map_err(|e| match e {
            ComputeError::AddressExhausted { available, .. } => ComputeError::AddressExhausted {
                pool: *pool,
                purpose,
                required,
                available,
            },
            other => other,
        })
    }
}

fn to_link_net(addr: Ipv4Addr, subnet: &Ipv4Net) -> Result<Ipv4Net, ComputeError> {
    Ipv4Net::new(addr, subnet.prefix_len())
        .map_err(|_| ComputeError::InvalidPrefix { pool: *subnet, prefix: subnet.prefix_len() })
}
