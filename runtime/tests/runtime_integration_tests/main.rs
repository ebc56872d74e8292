// Licensed under the Apache-2.0 license

mod common;
mod test_aead;
mod test_asym;
mod test_fail_stop;
mod test_hash;
mod test_key_management;
mod test_mailbox;
mod test_ns_interface;
