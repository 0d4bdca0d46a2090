//! Modules linked into the daemon, in load order

use aircat_common::ModuleDescriptor;

pub static MODULES: &[ModuleDescriptor] = &[aircat_files::DESCRIPTOR];
