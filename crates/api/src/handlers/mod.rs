pub mod contact_request;
