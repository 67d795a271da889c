//! Numeric error kinds carried in [`ErrorRecord::kind`](crate::ErrorRecord).
//!
//! `0` is reserved for "no error". The table starts at 1001 and the
//! values are part of the client contract, so new kinds are only ever
//! appended.

pub const NONE: u32 = 0;

pub const INVALID_ACTION: u32 = 1001;
pub const INCORRECT_FORMAT: u32 = 1002;
pub const INCORRECT_CUSTOM_ACTION: u32 = 1003;
pub const NOT_LOGGED_IN: u32 = 1004;
pub const LOGGED_IN: u32 = 1005;
pub const STATUS_CHANGE: u32 = 1006;
pub const FEATURE_DISABLED: u32 = 1007;
pub const COLUMNS_FORMAT: u32 = 1008;
pub const NAME_FORMAT: u32 = 1009;
pub const PASSWORD_FORMAT: u32 = 1010;
pub const REMEMBER_FORMAT: u32 = 1011;
pub const GUEST_FORMAT: u32 = 1012;
pub const NEW_PASSWORD_FORMAT: u32 = 1013;
pub const ROOM_NAME_FORMAT: u32 = 1014;
pub const ROOM_TYPE_FORMAT: u32 = 1015;
pub const PRIVATE_FORMAT: u32 = 1016;
pub const MAX_ROOM_FORMAT: u32 = 1017;
pub const ROOM_CONTROL: u32 = 1018;
pub const SERVER_ROOM: u32 = 1019;
pub const NOT_OWNER: u32 = 1020;
pub const LOGIN: u32 = 1021;
pub const SIGN_UP: u32 = 1022;
pub const DELETE_ACCOUNT: u32 = 1023;
pub const PASSWORD_CHANGE: u32 = 1024;
pub const INFO_CHANGE: u32 = 1025;
pub const JOIN: u32 = 1026;
pub const LEAVE: u32 = 1027;
pub const CREATE_ROOM: u32 = 1028;
pub const DELETE_ROOM: u32 = 1029;
pub const INVITE: u32 = 1030;
pub const REVOKE_INVITE: u32 = 1031;
pub const FRIEND_REQUEST: u32 = 1032;
pub const FRIEND_ACCEPT: u32 = 1033;
pub const FRIEND_DECLINE: u32 = 1034;
pub const FRIEND_REMOVE: u32 = 1035;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_contiguous() {
        let kinds = [
            INVALID_ACTION, INCORRECT_FORMAT, INCORRECT_CUSTOM_ACTION, NOT_LOGGED_IN,
            LOGGED_IN, STATUS_CHANGE, FEATURE_DISABLED, COLUMNS_FORMAT, NAME_FORMAT,
            PASSWORD_FORMAT, REMEMBER_FORMAT, GUEST_FORMAT, NEW_PASSWORD_FORMAT,
            ROOM_NAME_FORMAT, ROOM_TYPE_FORMAT, PRIVATE_FORMAT, MAX_ROOM_FORMAT,
            ROOM_CONTROL, SERVER_ROOM, NOT_OWNER, LOGIN, SIGN_UP, DELETE_ACCOUNT,
            PASSWORD_CHANGE, INFO_CHANGE, JOIN, LEAVE, CREATE_ROOM, DELETE_ROOM,
            INVITE, REVOKE_INVITE, FRIEND_REQUEST, FRIEND_ACCEPT, FRIEND_DECLINE,
            FRIEND_REMOVE,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            assert_eq!(*kind, 1001 + i as u32);
        }
    }
}
