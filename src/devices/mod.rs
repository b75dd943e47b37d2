
// Only Santec tunable lasers for now.  Other instruments speaking the same line protocol
// would each get a module here sharing the session

pub mod tsl;
